use std::sync::Arc;

use rdc_bus::MessageBus;
use rdc_core::ResourceDriverService;

pub struct AppState<B: MessageBus> {
    pub service: Arc<ResourceDriverService<B>>,
    pub auth_token: Option<String>,
}

impl<B: MessageBus> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            auth_token: self.auth_token.clone(),
        }
    }
}
