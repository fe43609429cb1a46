use std::time::Duration;

use anyhow::{Result, anyhow};
use headless_chrome::{Browser, LaunchOptions};

/// Fetch fully-rendered page HTML through headless Chrome. Used for rulesets
/// that opt into rendering because the price markup is script-built. A fresh
/// browser is launched per fetch.
pub async fn fetch_rendered_html(
    url: &str,
    timeout: Duration,
    chrome_path: Option<String>,
) -> Result<String> {
    let url = url.to_string();
    tokio::task::spawn_blocking(move || render_blocking(&url, timeout, chrome_path))
        .await
        .map_err(|e| anyhow!("Render task failed: {}", e))?
}

fn render_blocking(url: &str, timeout: Duration, chrome_path: Option<String>) -> Result<String> {
    let mut launch_options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false) // Often needed in containerized environments
        .idle_browser_timeout(timeout)
        .args(vec![
            std::ffi::OsStr::new("--no-sandbox"),
            std::ffi::OsStr::new("--disable-dev-shm-usage"),
            std::ffi::OsStr::new("--disable-gpu"),
            std::ffi::OsStr::new("--disable-extensions"),
        ])
        .build()
        .map_err(|e| anyhow!("Failed to create launch options: {}", e))?;

    if let Some(path) = chrome_path {
        launch_options.path = Some(std::path::PathBuf::from(path));
    }

    let browser = Browser::new(launch_options)
        .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

    let tab = browser
        .new_tab()
        .map_err(|e| anyhow!("Failed to create tab: {}", e))?;

    tab.navigate_to(url)
        .map_err(|e| anyhow!("Navigation failed: {}", e))?;
    tab.wait_until_navigated()
        .map_err(|e| anyhow!("Page load failed: {}", e))?;

    let html = tab
        .get_content()
        .map_err(|e| anyhow!("Failed to get page content: {}", e))?;

    let _ = tab.close(true);

    Ok(html)
}
