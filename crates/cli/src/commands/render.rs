//! Terminal output. Every line the CLI prints goes through here.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use bazaar_client::store::{Cart, Toast, ToastKind};
use bazaar_core::{
    Chat, Coupon, CouponApplication, CurrencyCode, Message, NOT_AVAILABLE, Order, Paginated,
    Price, Product, SellerStats, User, UserId, WishlistItem,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

fn money(amount: Decimal) -> Price {
    Price::new(amount, CurrencyCode::default())
}

fn date(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| NOT_AVAILABLE.to_string(), |t| t.format("%Y-%m-%d").to_string())
}

pub fn failure(message: &str) {
    eprintln!("error: {message}");
}

pub fn toast(toast: &Toast) {
    match toast.kind {
        ToastKind::Success => println!("✓ {}", toast.message),
        ToastKind::Error => eprintln!("✗ {}", toast.message),
    }
}

pub fn line(text: &str) {
    println!("{text}");
}

pub fn user(user: &User) {
    println!("{} <{}>", user.name_display(), user.email_display());
    println!("  id:      {}", user.id);
    println!("  role:    {:?}", user.role);
    println!("  phone:   {}", user.phone_display());
    println!("  address: {}", user.address_display());
}

pub fn products(page: &Paginated<Product>) {
    if page.is_empty() {
        println!("No products match.");
        return;
    }
    for product in &page.items {
        let stock = if product.in_stock() { "" } else { "  (out of stock)" };
        println!(
            "{:<26} {:>10}  {}{stock}",
            product.id,
            money(product.effective_price()).to_string(),
            product.name,
        );
    }
    println!(
        "Page {} of {} ({} products)",
        page.meta.page,
        page.meta.total_page.max(1),
        page.meta.total
    );
}

pub fn product(product: &Product) {
    println!("{}", product.name);
    println!("  id:       {}", product.id);
    println!("  price:    {}", money(product.effective_price()));
    if product.discount_price.is_some() {
        println!("  was:      {}", money(product.price));
    }
    println!("  stock:    {}", product.stock);
    println!("  category: {}", product.category_display());
    println!("  {}", product.description_display());
    for variant in &product.variants {
        let price = variant
            .price
            .map_or_else(String::new, |p| format!("  {}", money(p)));
        println!("  - {} [{}]{price}  stock {}", variant.label(), variant.id, variant.stock);
    }
}

pub fn cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for line in cart.lines() {
        let variant = line
            .variant_label
            .as_deref()
            .map_or_else(String::new, |l| format!(" ({l})"));
        println!(
            "{:>3} x {}{variant}  {}",
            line.quantity,
            line.name,
            money(line.line_total())
        );
    }
    println!("{} items, subtotal {}", cart.item_count(), money(cart.subtotal()));
}

pub fn orders(page: &Paginated<Order>) {
    if page.is_empty() {
        println!("No orders yet.");
        return;
    }
    for order in &page.items {
        println!(
            "{:<26} {:<10} {:>10}  {} items  {}",
            order.id,
            order.status,
            money(order.total).to_string(),
            order.item_count(),
            date(order.created_at)
        );
    }
    println!("Page {} of {}", page.meta.page, page.meta.total_page.max(1));
}

pub fn order(order: &Order) {
    println!("Order {} - {}", order.id, order.status);
    for item in &order.items {
        println!(
            "  {:>3} x {}  {}",
            item.quantity,
            item.name.as_deref().unwrap_or(item.product.id()),
            money(item.line_total())
        );
    }
    if !order.discount.is_zero() {
        println!("  discount: -{}", money(order.discount));
    }
    println!("  total:    {}", money(order.total));
}

pub fn wishlist(items: &[WishlistItem]) {
    if items.is_empty() {
        println!("Your wishlist is empty.");
        return;
    }
    for item in items {
        println!(
            "{:<26} {:>10}  {}",
            item.product.id,
            money(item.product.effective_price()).to_string(),
            item.product.name
        );
    }
}

pub fn coupons(coupons: &[Coupon]) {
    if coupons.is_empty() {
        println!("No coupons.");
        return;
    }
    let now = Utc::now();
    for coupon in coupons {
        let state = if coupon.is_usable_at(now) { "active" } else { "inactive" };
        println!(
            "{:<20} {:?} {:>8}  expires {}  {state}",
            coupon.code,
            coupon.discount_type,
            coupon.discount,
            date(coupon.expires_at)
        );
    }
}

pub fn coupon_application(applied: &CouponApplication) {
    println!(
        "{}: -{} -> total {}",
        applied.code,
        money(applied.discount),
        money(applied.total)
    );
}

pub fn chats(chats: &[Chat], me: Option<&UserId>) {
    if chats.is_empty() {
        println!("No conversations.");
        return;
    }
    for chat in chats {
        let with = me
            .and_then(|id| chat.counterpart(id))
            .map_or(NOT_AVAILABLE, |u| u.name.as_str());
        let unread = if chat.unread > 0 {
            format!(" ({} unread)", chat.unread)
        } else {
            String::new()
        };
        println!("{:<26} {with}{unread}: {}", chat.id, chat.preview());
    }
}

pub fn messages(messages: &[Message], me: Option<&UserId>) {
    for message in messages {
        let who = if Some(&message.sender) == me { "you" } else { "them" };
        println!("[{}] {who}: {}", date(message.created_at), message.text);
    }
}

pub fn stats(stats: &SellerStats) {
    println!("Total sales:    {}", money(stats.total_sales));
    println!("Orders:         {}", stats.total_orders);
    println!("Pending orders: {}", stats.pending_orders);
    println!("Products:       {}", stats.total_products);
    if !stats.recent_orders.is_empty() {
        println!("Recent orders:");
        for order in &stats.recent_orders {
            println!("  {} {} {}", order.id, order.status, money(order.total));
        }
    }
}
