use poem_openapi::payload::PlainText;

pub struct HealthService<'a> {
    pub backend: &'a str,
}

impl<'a> HealthService<'a> {
    pub fn new(backend: &'a str) -> Self {
        Self { backend }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn status_text(&self) -> PlainText<String> {
        PlainText(format!(
            "{} version={} store={}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            self.backend
        ))
    }
}
