mod common;

use anyhow::Result;
use common::{empty_service, persistent_service, settings_repo};
use fiscus::application::WalletService;
use fiscus::domain::{SETTINGS_STORAGE_KEY, Settings};
use tempfile::TempDir;

#[tokio::test]
async fn test_first_load_yields_defaults() -> Result<()> {
    let temp = TempDir::new()?;
    let service = persistent_service(&temp).await?;

    assert_eq!(service.settings().await, Settings::defaults());
    Ok(())
}

#[tokio::test]
async fn test_update_survives_a_new_session() -> Result<()> {
    let temp = TempDir::new()?;

    {
        let service = persistent_service(&temp).await?;
        service.update_setting("marketing_emails", true).await?;
        service.update_setting("push_notifications", false).await?;
        service.update_setting("beta_features", true).await?;
    }

    let service = persistent_service(&temp).await?;
    let settings = service.settings().await;
    assert_eq!(settings.get("marketing_emails"), Some(true));
    assert_eq!(settings.get("push_notifications"), Some(false));
    assert_eq!(settings.get("beta_features"), Some(true));
    assert_eq!(settings.get("security_alerts"), Some(true));

    Ok(())
}

#[tokio::test]
async fn test_blob_is_overwritten_wholesale() -> Result<()> {
    let temp = TempDir::new()?;
    let service = persistent_service(&temp).await?;

    let replacement: Settings = [("only_key".to_string(), false)].into_iter().collect();
    service.save_settings(replacement.clone()).await?;

    let repo = settings_repo(&temp).await?;
    let stored = repo.get_value(SETTINGS_STORAGE_KEY).await?.unwrap();
    assert_eq!(stored, r#"{"only_key":false}"#);
    assert_eq!(Settings::from_json(&stored)?, replacement);

    Ok(())
}

#[tokio::test]
async fn test_unreadable_blob_falls_back_to_defaults() -> Result<()> {
    let temp = TempDir::new()?;
    let repo = settings_repo(&temp).await?;
    repo.put_value(SETTINGS_STORAGE_KEY, "not json").await?;

    let service = WalletService::empty().with_repository(repo);
    let loaded = service.load_settings().await?;
    assert_eq!(loaded, Settings::defaults());

    Ok(())
}

#[tokio::test]
async fn test_reset_restores_defaults() -> Result<()> {
    let temp = TempDir::new()?;
    let service = persistent_service(&temp).await?;

    service.update_setting("sms_notifications", true).await?;
    let settings = service.reset_settings().await?;
    assert_eq!(settings, Settings::defaults());

    let repo = settings_repo(&temp).await?;
    assert_eq!(repo.get_value(SETTINGS_STORAGE_KEY).await?, None);
    assert!(!repo.delete_value(SETTINGS_STORAGE_KEY).await?);

    let service = persistent_service(&temp).await?;
    assert_eq!(service.settings().await.get("sms_notifications"), Some(false));
    Ok(())
}

#[tokio::test]
async fn test_settings_without_storage_stay_in_session() -> Result<()> {
    let service = empty_service();
    service.update_setting("card_activity", false).await?;
    assert_eq!(service.settings().await.get("card_activity"), Some(false));

    let err = service.update_setting("", true).await.unwrap_err();
    assert!(err.to_string().contains("setting key is required"));
    Ok(())
}
