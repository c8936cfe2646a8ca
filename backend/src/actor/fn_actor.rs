//! Closure-backed actor

use super::{Actor, ActorContext, ActorError, Step};

/// Actor whose body is a closure
///
/// State that must survive between resumptions lives in the closure's
/// captures.
///
/// # Example
///
/// ```
/// use cashflow_simulator_core::actor::{FnActor, Step};
///
/// let mut emitted = false;
/// let bonus = FnActor::new("bonus", move |ctx| {
///     if emitted {
///         return Ok(Step::Finish);
///     }
///     emitted = true;
///     Ok(ctx.emit(50_000, "employer", "checking", "Annual bonus"))
/// });
/// # drop(bonus);
/// ```
pub struct FnActor<F> {
    name: String,
    body: F,
}

impl<F> FnActor<F>
where
    F: FnMut(&ActorContext<'_>) -> Result<Step, ActorError>,
{
    pub fn new(name: impl Into<String>, body: F) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }
}

impl<F> Actor for FnActor<F>
where
    F: FnMut(&ActorContext<'_>) -> Result<Step, ActorError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &ActorContext<'_>) -> Result<Step, ActorError> {
        (self.body)(ctx)
    }
}
