//! Sign-in command handlers.

use anyhow::Result;
use roster_app::Action;
use roster_app::update::MSG_SIGNED_OUT;
use roster_core::Session;

use super::{Env, expect_message};

pub async fn login(env: &Env) -> Result<()> {
    let mut app = env.open().await?;
    if let Some(principal) = app.session().principal() {
        println!("Already signed in as {principal}");
        return Ok(());
    }

    app.perform(Action::SignIn).await;
    match app.session().principal() {
        Some(principal) => {
            println!("Signed in as {principal}");
            Ok(())
        }
        None => anyhow::bail!(
            "{}",
            app.view().message.as_deref().unwrap_or("Sign in failed")
        ),
    }
}

pub async fn logout(env: &Env) -> Result<()> {
    let mut app = env.open().await?;
    if !app.session().is_authenticated() {
        println!("Not signed in");
        return Ok(());
    }

    app.perform(Action::SignOut).await;
    expect_message(&app, MSG_SIGNED_OUT)
}

pub async fn whoami(env: &Env) -> Result<()> {
    let app = env.open().await?;
    println!("{}", describe(app.session()));
    Ok(())
}

fn describe(session: &Session) -> String {
    let Some(identity) = session.identity() else {
        return "Not signed in".to_string();
    };
    let expires = identity.expires_at().map_or_else(
        || "never".to_string(),
        |at| {
            at.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M %Z")
                .to_string()
        },
    );
    format!("Principal: {}\nExpires:   {expires}", identity.principal())
}
