//! `cart add|remove|show|clear` and `checkout`.

use bazaar_client::store::{Action, CartLine};
use bazaar_client::validation::{ApplyCouponForm, CheckoutForm};
use bazaar_core::{PaymentMethod, ProductId, ShippingAddress, VariantId};
use clap::{Args, Subcommand};

use super::{CliError, Context, render};

#[derive(Subcommand)]
pub enum CartAction {
    /// Add a product to the cart
    Add {
        product: String,
        /// Variant ID
        #[arg(short, long)]
        variant: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Change a line's quantity (0 removes it)
    Set {
        product: String,
        #[arg(short, long)]
        variant: Option<String>,
        quantity: u32,
    },
    /// Remove a line
    Remove {
        product: String,
        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Show the cart
    Show,
    /// Empty the cart
    Clear,
}

#[derive(Args)]
pub struct CheckoutArgs {
    /// Recipient name
    #[arg(long)]
    name: String,
    #[arg(long)]
    phone: String,
    /// Street address
    #[arg(long)]
    address: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    postal_code: Option<String>,
    #[arg(long)]
    country: Option<String>,
    /// `cash_on_delivery` or `card`
    #[arg(long, default_value = "cash_on_delivery")]
    payment: PaymentMethod,
    #[arg(long)]
    coupon: Option<String>,
}

pub async fn run(ctx: &mut Context, action: CartAction) -> Result<(), CliError> {
    match action {
        CartAction::Add {
            product,
            variant,
            quantity,
        } => {
            let result = ctx.client.product(&ProductId::new(product)).await;
            let product = ctx.read(result)?;
            let variant = match variant {
                Some(id) => Some(
                    product
                        .variants
                        .iter()
                        .find(|v| v.id.as_str() == id)
                        .ok_or_else(|| {
                            CliError::Usage(format!("{} has no variant {id}", product.name))
                        })?,
                ),
                None => None,
            };
            if !variant.map_or(product.in_stock(), |v| v.stock > 0) {
                return Err(CliError::Usage(format!("{} is out of stock", product.name)));
            }

            let line = CartLine::from_product(&product, variant, quantity);
            ctx.store.dispatch(Action::AddToCart(line));
            ctx.toast(bazaar_client::store::Toast::success(format!(
                "Added {} to cart",
                product.name
            )));
        }
        CartAction::Set {
            product,
            variant,
            quantity,
        } => ctx.store.dispatch(Action::SetQuantity {
            product: ProductId::new(product),
            variant: variant.map(VariantId::new),
            quantity,
        }),
        CartAction::Remove { product, variant } => ctx.store.dispatch(Action::RemoveFromCart {
            product: ProductId::new(product),
            variant: variant.map(VariantId::new),
        }),
        CartAction::Show => {}
        CartAction::Clear => ctx.store.dispatch(Action::ClearCart),
    }
    render::cart(&ctx.store.state().cart);
    Ok(())
}

pub async fn checkout(ctx: &mut Context, args: CheckoutArgs) -> Result<(), CliError> {
    ctx.require_login()?;
    let cart = ctx.store.state().cart.clone();

    if let Some(code) = &args.coupon {
        let form = ApplyCouponForm {
            code: code.clone(),
            subtotal: cart.subtotal(),
            shop: cart.single_shop().cloned(),
        };
        let result = ctx.client.apply_coupon(&form).await;
        render::coupon_application(&ctx.read(result)?);
    }

    let form = CheckoutForm {
        items: cart.to_order_items(),
        shipping_address: ShippingAddress {
            full_name: args.name,
            phone: args.phone,
            address_line: args.address,
            city: args.city,
            postal_code: args.postal_code,
            country: args.country,
        },
        payment_method: args.payment,
        coupon_code: args.coupon,
    };

    let result = ctx.client.place_order(&form).await;
    let order = ctx.report(result, "Order placed")?;
    ctx.store.dispatch(Action::ClearCart);
    render::order(&order);
    Ok(())
}
