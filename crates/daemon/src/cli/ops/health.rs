use clap::Args;

use blade_daemon::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Health;

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = std::convert::Infallible;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        lines.push("Config:".to_string());
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                lines.push(format!("  directory:       {}", state.blade_dir.display()));
                lines.push(format!("  address:         {}", state.config.address()));
                lines.push(format!("  federation_port: {}", state.config.federation_port));
                lines.push(format!("  api_port:        {}", state.config.api_port));
                match state.load_key() {
                    Ok(key) => lines.push(format!("  public key:      {}", key.public())),
                    Err(e) => lines.push(format!("  key.pem:         {}", e)),
                }
            }
            Err(e) => lines.push(format!("  error: {}", e)),
        }

        let base = ctx.client.base_url();
        let client = ctx.client.http_client();

        lines.push(String::new());
        lines.push(format!("Daemon ({}):", base));

        for endpoint in ["livez", "readyz"] {
            let url = format!(
                "{}/_status/{}",
                base.as_str().trim_end_matches('/'),
                endpoint
            );
            let line = match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => format!("  {:<7} OK", endpoint),
                Ok(resp) => format!("  {:<7} UNHEALTHY ({})", endpoint, resp.status()),
                Err(_) => format!("  {:<7} NOT REACHABLE", endpoint),
            };
            lines.push(line);
        }

        Ok(lines.join("\n"))
    }
}
