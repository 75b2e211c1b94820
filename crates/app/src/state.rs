use services::ProgressServices;

#[derive(Clone)]
pub struct AppState {
    pub services: ProgressServices,
}

impl AppState {
    #[must_use]
    pub fn new(services: ProgressServices) -> Self {
        Self { services }
    }
}
