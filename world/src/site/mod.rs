pub mod end_city;
pub mod fortress;
pub mod ruin;

use common::terrain::TemplateManager;

/// Every template the structure families in this crate refer to.
pub fn builtin_templates() -> TemplateManager {
    TemplateManager::new()
        .with(end_city::templates())
        .with(ruin::templates())
}
