//! The application's dependency bundle.

use crate::middleware::CsrfConfig;
use crate::session::SessionManager;
use crate::store::Backend;
use crate::templates::TemplateCache;

/// Everything a handler or middleware layer depends on.
///
/// Built once at startup, then shared read-only as `Arc<App<B>>` by every
/// connection task. There is no global handle: components receive the bundle
/// explicitly.
pub struct App<B: Backend> {
    pub snippets: B::Snippets,
    pub users: B::Users,
    pub sessions: SessionManager<B::Sessions>,
    pub templates: TemplateCache,
    pub csrf: CsrfConfig,
    /// Expose error detail and traces in 500 bodies.
    pub debug: bool,
}

impl<B: Backend> App<B> {
    pub fn new(
        snippets: B::Snippets,
        users: B::Users,
        sessions: SessionManager<B::Sessions>,
        templates: TemplateCache,
    ) -> Self {
        Self {
            snippets,
            users,
            sessions,
            templates,
            csrf: CsrfConfig::default(),
            debug: false,
        }
    }

    pub fn with_csrf(mut self, csrf: CsrfConfig) -> Self {
        self.csrf = csrf;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
