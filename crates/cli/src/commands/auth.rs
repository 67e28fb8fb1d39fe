//! `login`, `logout`, `register`, `whoami`.

use bazaar_client::store::Action;
use bazaar_client::validation::{LoginForm, RegisterForm, SellerRegisterForm};

use super::{CliError, Context, render};

pub async fn login(ctx: &mut Context, email: String, password: String) -> Result<(), CliError> {
    let result = ctx.client.login(&LoginForm { email, password }).await;
    let session = ctx.report(result, "Signed in")?;
    ctx.store.dispatch(Action::LoggedIn(session));
    Ok(())
}

pub async fn logout(ctx: &mut Context) -> Result<(), CliError> {
    ctx.client.logout().await;
    ctx.store.dispatch(Action::LoggedOut);
    render::line("Signed out.");
    Ok(())
}

pub async fn register(
    ctx: &mut Context,
    name: String,
    email: String,
    password: String,
    shop: Option<String>,
    phone: Option<String>,
) -> Result<(), CliError> {
    let confirm_password = password.clone();
    let result = match shop {
        Some(shop_name) => {
            let form = SellerRegisterForm {
                name,
                email,
                password,
                confirm_password,
                shop_name,
                phone: phone.unwrap_or_default(),
            };
            ctx.client.register_seller(&form).await
        }
        None => {
            let form = RegisterForm {
                name,
                email,
                password,
                confirm_password,
            };
            ctx.client.register(&form).await
        }
    };

    let session = ctx.report(result, "Account created")?;
    ctx.store.dispatch(Action::LoggedIn(session));
    Ok(())
}

pub async fn whoami(ctx: &mut Context) -> Result<(), CliError> {
    ctx.require_login()?;
    let result = ctx.client.me().await;
    let user = ctx.read(result)?;
    render::user(&user);
    Ok(())
}
