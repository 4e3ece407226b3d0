use crate::{error, server::start_api_server};

pub async fn serve(addr: Option<String>) {
    let (settings, pipeline) = super::build_pipeline().await;
    let addr = addr.unwrap_or(settings.server_addr);

    if let Err(e) = start_api_server(&addr, pipeline).await {
        error!("Server on {} stopped: {}", addr, e);
    }
}
