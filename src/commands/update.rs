//! Update command handler.

use crate::context::RuntimeContext;
use crate::diagnostics::Diagnostics;
use crate::directive::ReifyDirective;
use crate::engine::{Engine, EngineFactory};
use crate::finish::Finalize;

/// Category the deprecated depth warning is reported under.
pub const WARNING_CATEGORY: &str = "update";

/// Warning shown when the deprecated depth option is used.
pub const DEPTH_WARNING: &str = "The --depth option no longer has any effect. See RFC0019.\n\
    https://github.com/npm/rfcs/blob/latest/implemented/0019-remove-update-depth-option.md";

/// The update command, wired to its collaborators.
pub struct Update<F, Z, D> {
    factory: F,
    finisher: Z,
    diagnostics: D,
}

impl<F, Z, D> Update<F, Z, D>
where
    F: EngineFactory,
    Z: Finalize<F::Engine>,
    D: Diagnostics,
{
    /// Wire the command to an engine factory, a finisher and a diagnostics sink.
    #[must_use]
    pub fn new(factory: F, finisher: Z, diagnostics: D) -> Self {
        Self {
            factory,
            finisher,
            diagnostics,
        }
    }

    /// Build the directive for an invocation, warning about the deprecated depth option.
    ///
    /// No targets means every installed dependency is updated.
    pub fn plan(&self, ctx: &RuntimeContext, targets: &[String]) -> ReifyDirective {
        let path = ctx.target_path();
        log::debug!("Updating in {}", path.display());

        if ctx.depth_is_set() {
            self.diagnostics.warn(WARNING_CATEGORY, DEPTH_WARNING);
        }

        let directive = ReifyDirective::new(ctx.options.clone(), &path, targets);
        log::trace!("Reify directive: {directive:#?}");
        directive
    }

    /// Run the update.
    ///
    /// # Errors
    ///
    /// Returns the error of the engine's reify or of the finisher, as is. The finisher does not
    /// run when reify fails.
    pub async fn exec(&self, ctx: &RuntimeContext, targets: &[String]) -> anyhow::Result<()> {
        let directive = self.plan(ctx, targets);

        let mut engine = self.factory.create(directive.engine_args());
        log::info!("Reifying {}...", directive.path.display());
        engine.reify(&directive.request()).await?;

        log::info!("Finishing update...");
        self.finisher.finish(ctx, &engine).await?;
        Ok(())
    }
}
