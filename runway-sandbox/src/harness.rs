//! JavaScript harness wrapped around every script
//!
//! The harness loads the script as a CommonJS module, looks up the default
//! export, calls it and records the settled result in `__runway_state`. All
//! values cross the engine boundary as JSON text.

use runway_ipc::{RunRequest, ScriptOutcome};
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Global holding the harness state once the program has been evaluated
pub(crate) const STATE_EXPRESSION: &str = "JSON.stringify(__runway_state)";

const HARNESS: &str = r#"
var __runway_state = (function (source, tenant, input, isAction) {
    var state = { logs: [], outcome: null };

    function render(value) {
        if (typeof value === 'string') {
            return value;
        }
        try {
            return JSON.stringify(value);
        } catch (err) {
            return String(value);
        }
    }

    function describe(err) {
        if (err instanceof Error) {
            var fields = { name: String(err.name), message: String(err.message) };
            Object.getOwnPropertyNames(err).forEach(function (key) {
                if (key !== 'stack') {
                    fields[key] = err[key];
                }
            });
            var own;
            try {
                own = JSON.parse(JSON.stringify(fields));
            } catch (ignored) {
                own = { name: fields.name, message: fields.message };
            }
            return { message: fields.message, details: own };
        }
        if (err !== null && typeof err === 'object') {
            var details = null;
            try {
                details = JSON.parse(JSON.stringify(err));
            } catch (ignored) {}
            var message = typeof err.message === 'string' ? err.message : render(err);
            return { message: message, details: details };
        }
        return { message: String(err), details: null };
    }

    function complete(value) {
        var output;
        try {
            output = JSON.stringify(value === undefined ? null : value);
        } catch (err) {
            state.outcome = {
                status: 'threw',
                message: 'Script returned output that cannot be serialized: ' + describe(err).message,
                details: null
            };
            return;
        }
        state.outcome = { status: 'completed', output: output === undefined ? 'null' : output };
    }

    function fail(err) {
        var described = describe(err);
        state.outcome = { status: 'threw', message: described.message, details: described.details };
    }

    var ctx = Object.freeze(Object.assign({}, tenant, {
        log: function () {
            var parts = [];
            for (var i = 0; i < arguments.length; i++) {
                parts.push(render(arguments[i]));
            }
            state.logs.push(parts.join(' '));
        }
    }));

    var module = { exports: {} };
    try {
        var load = new Function('module', 'exports', source);
        load(module, module.exports);
    } catch (err) {
        state.outcome = { status: 'load_failed', message: describe(err).message };
        return state;
    }

    var entry = module.exports ? module.exports.default : undefined;
    if (typeof entry !== 'function') {
        state.outcome = { status: 'missing_default_export' };
        return state;
    }

    var returned;
    try {
        returned = isAction ? entry(ctx, input) : entry(ctx);
    } catch (err) {
        fail(err);
        return state;
    }

    if (returned !== null && typeof returned === 'object' && typeof returned.then === 'function') {
        Promise.resolve(returned).then(complete, fail);
    } else {
        complete(returned);
    }
    return state;
})"#;

/// Build the program evaluated for one invocation
pub(crate) fn program(request: &RunRequest) -> Result<String, serde_json::Error> {
    let source = serde_json::to_string(&request.code)?;
    let tenant = serde_json::to_string(&request.tenant)?;
    let input = match &request.input {
        Some(input) => serde_json::to_string(input)?,
        None => "undefined".to_string(),
    };

    Ok(format!(
        "{}({}, {}, {}, {});",
        HARNESS, source, tenant, input, request.is_action
    ))
}

#[derive(Debug, Deserialize)]
pub(crate) struct HarnessState {
    pub logs: Vec<String>,
    pub outcome: Option<HarnessOutcome>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum HarnessOutcome {
    Completed {
        output: String,
    },
    Threw {
        message: String,
        #[serde(default)]
        details: Option<JsonValue>,
    },
    LoadFailed {
        message: String,
    },
    MissingDefaultExport,
}

impl HarnessOutcome {
    pub fn into_outcome(self) -> Result<ScriptOutcome, serde_json::Error> {
        Ok(match self {
            HarnessOutcome::Completed { output } => ScriptOutcome::Completed {
                output: serde_json::from_str(&output)?,
            },
            HarnessOutcome::Threw { message, details } => ScriptOutcome::Threw { message, details },
            HarnessOutcome::LoadFailed { message } => ScriptOutcome::LoadFailed { message },
            HarnessOutcome::MissingDefaultExport => ScriptOutcome::MissingDefaultExport,
        })
    }
}
