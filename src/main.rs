mod telemetry;

use reminder_engine_api::Application;
use reminder_engine_infra::{run_migration, setup_context};
use telemetry::{get_subscriber, init_subscriber};
use tracing::error;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    openssl_probe::init_ssl_cert_env_vars();

    let subscriber = get_subscriber("reminder_engine".into(), "info".into());
    init_subscriber(subscriber);

    if let Err(e) = run_migration().await {
        error!("Unable to run migrations: {:?}", e);
        return Err(std::io::Error::new(std::io::ErrorKind::Other, e));
    }
    let context = setup_context().await.map_err(|e| {
        error!("Unable to setup the context: {:?}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let app = Application::new(context).await?;
    app.start().await
}
