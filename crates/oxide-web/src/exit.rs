//! Actions run when a handler chain is aborted.

use crate::context::Context;

/// Runs once when a chain is aborted, before control returns to dispatch.
///
/// Any `Fn(&mut Context)` closure is an exit.
pub trait Exit: Send + Sync {
    /// Finishes the response for an aborted request.
    fn exit(&self, ctx: &mut Context);
}

impl<F> Exit for F
where
    F: Fn(&mut Context) + Send + Sync,
{
    fn exit(&self, ctx: &mut Context) {
        self(ctx);
    }
}

/// Exit that leaves the response untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Exit for Silent {
    fn exit(&self, _ctx: &mut Context) {}
}

/// Exit that stages a fixed status code.
#[derive(Debug, Clone, Copy)]
pub struct Status(pub u16);

impl Exit for Status {
    fn exit(&self, ctx: &mut Context) {
        ctx.set_status(self.0);
    }
}
