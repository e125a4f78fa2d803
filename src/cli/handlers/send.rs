//! Send command handler
//!
//! One-shot dispatch from the command line. The outcome is printed to stdout
//! as JSON; anything but delivery is returned as an error so the process
//! exits non-zero.

use crate::cli::parser::SendArgs;
use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::services::Services;
use crate::services::push::{NotificationRequest, SendOutcome, send_with_retry};

pub struct SendCommandHandler {
    config: Settings,
}

impl SendCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    pub async fn execute(&self, args: &SendArgs) -> AppResult<()> {
        let services = Services::from_settings(&self.config)?;
        let outcome = dispatch(&services, args).await?;

        let rendered = serde_json::to_string(&outcome)
            .map_err(|e| AppError::from(anyhow::Error::from(e)))?;
        println!("{rendered}");

        if outcome.is_delivered() {
            Ok(())
        } else {
            Err(AppError::DeliveryFailed { outcome })
        }
    }
}

fn to_request(args: &SendArgs) -> AppResult<NotificationRequest> {
    let mut request = NotificationRequest::new(args.user.as_str(), args.content.as_str())?;
    if let Some(ref category) = args.category {
        request = request.with_category(category.as_str());
    }
    if let Some(ref time) = args.time {
        request = request.with_time(time.as_str());
    }
    if let Some(ref image) = args.image {
        request = request.with_image(image.as_str());
    }
    Ok(request)
}

async fn dispatch(services: &Services, args: &SendArgs) -> AppResult<SendOutcome> {
    let request = to_request(args)?;
    let outcome = if args.retry {
        send_with_retry(&services.dispatcher, &request, &services.retry).await
    } else {
        services.dispatcher.send(&request).await
    };
    tracing::info!(
        user = %args.user,
        outcome = outcome.label(),
        "Send command finished"
    );
    Ok(outcome)
}
