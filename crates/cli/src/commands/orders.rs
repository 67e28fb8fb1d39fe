//! `orders mine|shop|show|status|cancel` and `dashboard`.

use bazaar_client::api::PageRequest;
use bazaar_core::{OrderId, OrderStatus};
use clap::Subcommand;

use super::{CliError, Context, render};

#[derive(Subcommand)]
pub enum OrdersAction {
    /// Orders you placed
    Mine {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Orders placed with your shop
    Shop {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show one order
    Show { id: String },
    /// Move an order along (processing, shipped, delivered, cancelled)
    Status { id: String, status: OrderStatus },
    /// Cancel one of your orders
    Cancel { id: String },
}

pub async fn run(ctx: &mut Context, action: OrdersAction) -> Result<(), CliError> {
    ctx.require_login()?;

    match action {
        OrdersAction::Mine { page } => {
            let result = ctx.client.my_orders(PageRequest::page(page)).await;
            render::orders(&ctx.read(result)?);
        }
        OrdersAction::Shop { page } => {
            let result = ctx.client.shop_orders(PageRequest::page(page)).await;
            render::orders(&ctx.read(result)?);
        }
        OrdersAction::Show { id } => {
            let result = ctx.client.order(&OrderId::new(id)).await;
            render::order(&ctx.read(result)?);
        }
        OrdersAction::Status { id, status } => {
            let result = ctx.client.order(&OrderId::new(id)).await;
            let order = ctx.read(result)?;
            let result = ctx.client.advance_order(&order, status).await;
            let updated = ctx.report(result, &format!("Order marked {status}"))?;
            render::order(&updated);
        }
        OrdersAction::Cancel { id } => {
            let result = ctx.client.cancel_order(&OrderId::new(id)).await;
            let order = ctx.report(result, "Order cancelled")?;
            render::order(&order);
        }
    }
    Ok(())
}

pub async fn dashboard(ctx: &mut Context) -> Result<(), CliError> {
    ctx.require_login()?;
    if !ctx.store.state().auth.is_seller() {
        return Err(CliError::Usage("The dashboard is for sellers.".to_string()));
    }
    let result = ctx.client.seller_stats().await;
    render::stats(&ctx.read(result)?);
    Ok(())
}
