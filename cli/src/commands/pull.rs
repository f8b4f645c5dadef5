use anyhow::Result;
use hubfetch_core::token::resolve_token;
use hubfetch_core::{
    download_snapshot, model_dir, CancelToken, Config, HubClient, HubError, HuggingFaceHub, Messages,
    Msg, TokenStore,
};

pub async fn execute(config: &Config, messages: &Messages, cancel: CancelToken, model: &str) -> Result<()> {
    let hub = HuggingFaceHub::new(&config.hub.endpoint)?;

    // Public models download without a token.
    if let Some(token) = resolve_token(&TokenStore::default()) {
        match cancel.run_until_cancelled(hub.whoami(&token)).await {
            Ok(_) => println!("{}", messages.get(Msg::SuccessLogin)),
            Err(HubError::Cancelled) => {
                println!("{}", messages.get(Msg::ExitMessage));
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token rejected, continuing anonymously");
                println!("{}", messages.render(Msg::LoginError, &[("error", &e)]));
            }
        }
    }

    println!("{}", messages.render(Msg::DownloadStart, &[("model_id", &model)]));
    let destination = model_dir(&config.download.directory, model);

    match download_snapshot(&hub, model, &destination, &cancel, true).await {
        Ok(report) => {
            println!("{}", messages.render(Msg::DownloadSuccess, &[("model_id", &model)]));
            println!(
                "{}",
                messages.render(
                    Msg::DownloadSummary,
                    &[
                        ("downloaded", &report.downloaded),
                        ("skipped", &report.skipped),
                        ("path", &report.directory.display()),
                    ],
                )
            );
        }
        Err(e) if e.is_cancelled() || cancel.is_cancelled() => {
            println!("{}", messages.get(Msg::DownloadCancel));
        }
        Err(e) => {
            println!("{}", messages.render(Msg::DownloadError, &[("error", &e)]));
        }
    }

    Ok(())
}
