//! `products list|show`.

use bazaar_client::api::ProductSort;
use bazaar_client::store::Action;
use bazaar_core::{CategoryId, ProductId};
use clap::Subcommand;
use rust_decimal::Decimal;

use super::{CliError, Context, render};

#[derive(Subcommand)]
pub enum ProductsAction {
    /// List products
    List {
        /// Search term
        #[arg(short, long)]
        search: Option<String>,
        /// Category ID (repeatable)
        #[arg(short, long)]
        category: Vec<String>,
        #[arg(long)]
        min_price: Option<Decimal>,
        #[arg(long)]
        max_price: Option<Decimal>,
        /// newest, price-asc, price-desc or rating
        #[arg(long, default_value = "newest")]
        sort: ProductSort,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show one product with its variants
    Show { id: String },
    /// List categories
    Categories,
}

pub async fn run(ctx: &mut Context, action: ProductsAction) -> Result<(), CliError> {
    match action {
        ProductsAction::List {
            search,
            category,
            min_price,
            max_price,
            sort,
            page,
        } => {
            // Build the filter through the store the way the catalogue
            // page does, then list what it describes.
            ctx.store.dispatch(Action::ResetFilters);
            if let Some(search) = search {
                ctx.store.dispatch(Action::SetSearch(search));
            }
            for id in category {
                ctx.store
                    .dispatch(Action::ToggleCategory(CategoryId::new(id)));
            }
            ctx.store.dispatch(Action::SetPriceRange {
                min: min_price,
                max: max_price,
            });
            ctx.store.dispatch(Action::SetSort(sort));
            ctx.store.dispatch(Action::SetPage(page));

            let query = ctx.store.state().filters.to_query();
            let result = ctx.client.products(&query).await;
            render::products(&ctx.read(result)?);
        }
        ProductsAction::Show { id } => {
            let result = ctx.client.product(&ProductId::new(id)).await;
            render::product(&ctx.read(result)?);
        }
        ProductsAction::Categories => {
            let result = ctx.client.categories().await;
            for category in ctx.read(result)? {
                render::line(&format!("{:<26} {}", category.id, category.name));
            }
        }
    }
    Ok(())
}
