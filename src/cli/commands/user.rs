//! Account management commands.

use console::style;

use crate::config::Settings;
use crate::services::AccountService;

pub async fn cmd_user_create(
    settings: &Settings,
    username: &str,
    password: &str,
) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    ctx.migrate().await?;

    let user = AccountService::new(ctx).create(username, password).await?;
    println!(
        "{} Created user {} (id {})",
        style("✓").green(),
        style(&user.username).cyan(),
        user.id
    );
    Ok(())
}
