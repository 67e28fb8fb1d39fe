//! `wishlist list|add|remove`.

use bazaar_core::ProductId;
use clap::Subcommand;

use super::{CliError, Context, render};

#[derive(Subcommand)]
pub enum WishlistAction {
    /// Show saved products
    List,
    /// Save a product
    Add { product: String },
    /// Remove a saved product
    Remove { product: String },
}

pub async fn run(ctx: &mut Context, action: WishlistAction) -> Result<(), CliError> {
    ctx.require_login()?;

    match action {
        WishlistAction::List => {}
        WishlistAction::Add { product } => {
            let result = ctx.client.product(&ProductId::new(product)).await;
            let product = ctx.read(result)?;
            let result = ctx.client.add_to_wishlist(&product).await;
            ctx.report(result, &format!("Saved {}", product.name))?;
        }
        WishlistAction::Remove { product } => {
            let result = ctx
                .client
                .remove_from_wishlist(&ProductId::new(product))
                .await;
            ctx.report(result, "Removed from wishlist")?;
        }
    }

    let result = ctx.client.wishlist().await;
    render::wishlist(&ctx.read(result)?);
    Ok(())
}
