use poem_openapi::payload::PlainText;
use sea_orm::DatabaseConnection;

pub struct HealthService<'a> {
    pub db: &'a DatabaseConnection,
}

impl<'a> HealthService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn status_text(&self) -> PlainText<String> {
        match self.db.ping().await {
            Ok(()) => PlainText(format!(
                "bookgate version={} database=ok",
                env!("CARGO_PKG_VERSION")
            )),
            Err(e) => {
                tracing::warn!(error = %e, "database ping failed");
                PlainText(format!("error: {}", e))
            }
        }
    }
}
