//! Report, graph and comparison generators
//!
//! A generator posts a form for a resource and renders the returned
//! fragment into a target element. Rejections may carry helper text that is
//! shown along with the message.

use crate::controller::Controller;
use crate::diagram::Placement;
use crate::error::ControllerError;
use crate::notify::Notice;
use rcc_transport::{ApiError, FormData, GeneratorKind, ResourceRef};
use rcc_view::Fragment;

impl Controller {
    /// Run a generator and render its output into `target_id`
    ///
    /// # Errors
    /// `ControllerError::Validation` on rejection (helper text included in
    /// the notice), or transport failure; already reported
    #[tracing::instrument(skip(self, form), fields(resource = %resource))]
    pub async fn run_generator(
        &self,
        generator: GeneratorKind,
        resource: &ResourceRef,
        form: FormData,
        target_id: &str,
    ) -> Result<Placement, ControllerError> {
        let html = match self.api.generate(generator, resource, form).await {
            Ok(html) => html,
            Err(ApiError::Rejected { message, helper }) => {
                tracing::info!(%message, "generator rejected input");
                self.notifier
                    .notify(Notice::error(message.clone()).with_helper(helper));
                return Err(ControllerError::Validation(message));
            }
            Err(e) => return self.fail(ControllerError::from_api(e)),
        };

        let nodes = Fragment::parse(&html).into_nodes();
        let placed = self.with_scope(|scope| {
            if !scope.document.contains(target_id) {
                tracing::warn!(target = target_id, "generator target gone, dropping output");
                return Ok(Placement::Stale);
            }
            scope.render_into(&self.binder, target_id, nodes)?;
            scope.recompute(target_id)?;
            Ok::<_, rcc_view::ViewError>(Placement::Rendered)
        });
        match placed {
            Ok(placement) => Ok(placement),
            Err(e) => self.fail(e.into()),
        }
    }
}
