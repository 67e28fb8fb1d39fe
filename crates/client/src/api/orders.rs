//! Checkout and order tracking for buyers and sellers.

use bazaar_core::{Order, OrderId, OrderStatus, Paginated};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::cache::{Tag, TagKind};
use crate::endpoint::{Mutation, Query, decode_page};
use crate::error::ApiError;
use crate::http::ApiRequest;
use crate::validation::{CheckoutForm, ForId, OrderStatusForm, Validator};
use crate::{ApiClient, RawResponse};

const DEFAULT_ORDER_PAGE_SIZE: u32 = 10;

/// Page selection for order listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_ORDER_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    #[must_use]
    pub fn page(page: u32) -> Self {
        Self {
            page: page.max(1),
            ..Self::default()
        }
    }

    fn apply(self, request: ApiRequest) -> ApiRequest {
        request
            .query("page", self.page.max(1))
            .query("limit", self.limit)
    }
}

fn order_list_tags(output: Option<&Paginated<Order>>) -> Vec<Tag> {
    std::iter::once(Tag::list(TagKind::Order))
        .chain(
            output
                .into_iter()
                .flat_map(|page| &page.items)
                .map(|o| Tag::id(TagKind::Order, o.id.as_str())),
        )
        .collect()
}

// =============================================================================
// Queries
// =============================================================================

/// `GET /orders/my-orders`
pub struct MyOrders;

impl Query for MyOrders {
    const NAME: &'static str = "my_orders";
    type Args = PageRequest;
    type Output = Paginated<Order>;

    fn request(args: &PageRequest) -> Result<ApiRequest, ApiError> {
        Ok(args.apply(ApiRequest::get("/orders/my-orders")))
    }

    fn provides(_: &PageRequest, output: Option<&Paginated<Order>>) -> Vec<Tag> {
        order_list_tags(output)
    }

    fn decode(raw: RawResponse) -> Result<Paginated<Order>, ApiError> {
        decode_page(raw)
    }
}

/// `GET /orders/shop-orders`
pub struct ShopOrders;

impl Query for ShopOrders {
    const NAME: &'static str = "shop_orders";
    type Args = PageRequest;
    type Output = Paginated<Order>;

    fn request(args: &PageRequest) -> Result<ApiRequest, ApiError> {
        Ok(args.apply(ApiRequest::get("/orders/shop-orders")))
    }

    fn provides(_: &PageRequest, output: Option<&Paginated<Order>>) -> Vec<Tag> {
        order_list_tags(output)
    }

    fn decode(raw: RawResponse) -> Result<Paginated<Order>, ApiError> {
        decode_page(raw)
    }
}

/// `GET /orders/{id}`
pub struct OrderDetail;

impl Query for OrderDetail {
    const NAME: &'static str = "order";
    type Args = OrderId;
    type Output = Order;

    fn request(id: &OrderId) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::get(format!("/orders/{id}")))
    }

    fn provides(id: &OrderId, _: Option<&Order>) -> Vec<Tag> {
        vec![Tag::id(TagKind::Order, id.as_str())]
    }
}

// =============================================================================
// Mutations
// =============================================================================

/// `POST /orders`
pub struct PlaceOrder;

impl Mutation for PlaceOrder {
    const NAME: &'static str = "place_order";
    type Args = CheckoutForm;
    type Output = Order;

    fn request(args: &CheckoutForm) -> Result<ApiRequest, ApiError> {
        ApiRequest::post("/orders").json(args)
    }

    // Stock levels change with every order.
    fn invalidates(_: &CheckoutForm, _: &Order) -> Vec<Tag> {
        vec![
            Tag::list(TagKind::Order),
            Tag::list(TagKind::Product),
            Tag::list(TagKind::Dashboard),
        ]
    }
}

/// `PATCH /orders/{id}/status`
pub struct UpdateOrderStatus;

impl Mutation for UpdateOrderStatus {
    const NAME: &'static str = "update_order_status";
    type Args = ForId<OrderId, OrderStatusForm>;
    type Output = Order;

    fn request(args: &Self::Args) -> Result<ApiRequest, ApiError> {
        ApiRequest::patch(format!("/orders/{}/status", args.id)).json(&args.body)
    }

    fn invalidates(args: &Self::Args, _: &Order) -> Vec<Tag> {
        vec![
            Tag::id(TagKind::Order, args.id.as_str()),
            Tag::list(TagKind::Dashboard),
        ]
    }
}

/// `PATCH /orders/{id}/cancel`
pub struct CancelOrder;

impl Mutation for CancelOrder {
    const NAME: &'static str = "cancel_order";
    type Args = OrderId;
    type Output = Order;

    fn request(id: &OrderId) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::patch(format!("/orders/{id}/cancel")))
    }

    fn invalidates(id: &OrderId, _: &Order) -> Vec<Tag> {
        vec![
            Tag::id(TagKind::Order, id.as_str()),
            Tag::list(TagKind::Product),
            Tag::list(TagKind::Dashboard),
        ]
    }
}

impl ApiClient {
    /// Submit the checkout form.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the server rejects the order.
    #[instrument(skip_all, fields(items = form.items.len()))]
    pub async fn place_order(&self, form: &CheckoutForm) -> Result<Order, ApiError> {
        let order = self.mutate::<PlaceOrder>(form).await?;
        info!(order_id = %order.id, total = %order.total, "Order placed");
        Ok(order)
    }

    /// The buyer's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn my_orders(&self, page: PageRequest) -> Result<Paginated<Order>, ApiError> {
        self.query::<MyOrders>(&page).await
    }

    /// Orders placed with the seller's shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn shop_orders(&self, page: PageRequest) -> Result<Paginated<Order>, ApiError> {
        self.query::<ShopOrders>(&page).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order does not exist.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order(&self, id: &OrderId) -> Result<Order, ApiError> {
        self.query::<OrderDetail>(id).await
    }

    /// # Errors
    ///
    /// Returns an error if the server refuses the change.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        self.mutate::<UpdateOrderStatus>(&ForId::new(id.clone(), OrderStatusForm { status }))
            .await
    }

    /// Move `order` to `status`, refusing transitions the order lifecycle
    /// does not allow before asking the server.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a disallowed transition.
    pub async fn advance_order(&self, order: &Order, status: OrderStatus) -> Result<Order, ApiError> {
        Validator::new()
            .check("status", order.status.can_transition_to(status), || {
                format!("An order that is {} cannot become {status}", order.status)
            })
            .finish()?;
        self.update_order_status(&order.id, status).await
    }

    /// # Errors
    ///
    /// Returns an error if the order can no longer be cancelled.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn cancel_order(&self, id: &OrderId) -> Result<Order, ApiError> {
        self.mutate::<CancelOrder>(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps_to_first_page() {
        assert_eq!(PageRequest::page(0).page, 1);
        let request = MyOrders::request(&PageRequest::page(2)).unwrap();
        assert_eq!(request.path, "/orders/my-orders");
        assert_eq!(
            request.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_status_request_body() {
        let args = ForId::new(
            OrderId::new("o1"),
            OrderStatusForm {
                status: OrderStatus::Shipped,
            },
        );
        let request = UpdateOrderStatus::request(&args).unwrap();
        assert_eq!(request.path, "/orders/o1/status");
        match request.body {
            crate::http::RequestBody::Json(body) => assert_eq!(body["status"], "shipped"),
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[test]
    fn test_place_order_invalidates_stock() {
        let tags = PlaceOrder::invalidates(&CheckoutForm::default(), &sample_order());
        assert!(tags.contains(&Tag::list(TagKind::Product)));
        assert!(tags.contains(&Tag::list(TagKind::Order)));
    }

    fn sample_order() -> Order {
        serde_json::from_value(serde_json::json!({
            "_id": "o1",
            "items": [],
            "subtotal": "10.00",
            "total": "10.00",
            "status": "pending"
        }))
        .unwrap()
    }
}
