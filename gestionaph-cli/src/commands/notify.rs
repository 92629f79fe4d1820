use anyhow::Result;
use gestionaph_core::model::Audience;
use gestionaph_core::notifications::NewNotification;
use std::path::Path;

pub fn request(
    title: String,
    message: String,
    audience: Audience,
    user_id: Option<String>,
    sent_by: Option<String>,
) -> NewNotification {
    NewNotification { title, message, audience, user_id, sent_by }
}

pub async fn run(config_path: &Path, request: NewNotification) -> Result<()> {
    let portal = super::connect(config_path)?;
    let audience = request.audience;
    let receipt = portal.notifications().create(request).await?;

    println!("Sent to {} recipient(s) ({})", receipt.recipients, audience);
    for id in &receipt.ids {
        println!("  {}", id);
    }
    Ok(())
}
