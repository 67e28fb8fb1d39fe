//! `coupons list|create|delete|apply`.

use bazaar_client::validation::{ApplyCouponForm, CouponForm};
use bazaar_core::{CouponId, DiscountType};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use rust_decimal::Decimal;

use super::{CliError, Context, render};

#[derive(Subcommand)]
pub enum CouponAction {
    /// Your shop's coupons
    List,
    /// Create a coupon
    Create {
        /// 4-20 upper-case letters or digits
        code: String,
        /// percentage or fixed
        #[arg(short = 't', long, default_value = "percentage")]
        discount_type: DiscountType,
        #[arg(short, long)]
        discount: Decimal,
        #[arg(long)]
        min_order: Option<Decimal>,
        /// RFC 3339 timestamp, e.g. 2027-01-31T23:59:59Z
        #[arg(long)]
        expires: Option<DateTime<Utc>>,
    },
    /// Delete a coupon
    Delete { id: String },
    /// Price the cart with a coupon code
    Apply { code: String },
}

pub async fn run(ctx: &mut Context, action: CouponAction) -> Result<(), CliError> {
    ctx.require_login()?;

    match action {
        CouponAction::List => {
            let result = ctx.client.my_coupons().await;
            render::coupons(&ctx.read(result)?);
        }
        CouponAction::Create {
            code,
            discount_type,
            discount,
            min_order,
            expires,
        } => {
            let form = CouponForm {
                code,
                discount_type,
                discount,
                min_order_amount: min_order,
                expires_at: expires,
            };
            let result = ctx.client.create_coupon(&form).await;
            let coupon = ctx.report(result, "Coupon created")?;
            render::coupons(std::slice::from_ref(&coupon));
        }
        CouponAction::Delete { id } => {
            let result = ctx.client.delete_coupon(&CouponId::new(id)).await;
            ctx.report(result, "Coupon deleted")?;
        }
        CouponAction::Apply { code } => {
            let cart = &ctx.store.state().cart;
            let form = ApplyCouponForm {
                code,
                subtotal: cart.subtotal(),
                shop: cart.single_shop().cloned(),
            };
            let result = ctx.client.apply_coupon(&form).await;
            render::coupon_application(&ctx.read(result)?);
        }
    }
    Ok(())
}
