#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use oxide_web::{App, Context, Engine, Request, Response};

/// Shared, ordered record of handler activity.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    /// A handler that records `label` and lets the chain continue.
    pub fn mark(&self, label: &'static str) -> impl Fn(&mut Context) + Send + Sync + 'static {
        let trace = self.clone();
        move |_ctx: &mut Context| trace.push(label)
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub fn build(engine: Engine) -> App {
    engine
        .build()
        .unwrap_or_else(|e| panic!("Failed to build app: {e}"))
}

pub fn get(app: &App, path: &str) -> Response {
    app.dispatch(Request::get(path))
}

pub fn body(res: &Response) -> String {
    res.body_string()
        .unwrap_or_else(|| panic!("Body is not UTF-8: {:?}", res.body))
}

/// Handler echoing every captured parameter as `key=value` lines.
pub fn echo_params(ctx: &mut Context) {
    let text = ctx
        .params()
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");
    ctx.string(text);
}
