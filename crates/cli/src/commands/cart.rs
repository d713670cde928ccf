//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! swan-cli cart add p1 --name "Gentle Botanical Cleanser" --price 899 --variant 30ml
//! swan-cli cart set p1 3 --variant 30ml
//! swan-cli cart remove p1 --variant 30ml
//! swan-cli cart clear
//! ```

use clap::Subcommand;
use rust_decimal::Decimal;
use swan_botanical_core::{CartItem, Price};
use swan_botanical_session::{CartState, SessionProvider};

#[derive(Subcommand)]
pub enum CartAction {
    /// List lines with the item count and total
    Show,
    /// Add units of a product, merging with an existing line
    Add {
        /// Product id
        product_id: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Unit price
        #[arg(short, long, value_parser = parse_price)]
        price: Price,

        /// Variant label (size)
        #[arg(short, long)]
        variant: Option<String>,

        /// Image reference
        #[arg(short, long)]
        image: Option<String>,

        /// Units to add
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        product_id: String,

        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Replace a line's quantity (0 removes it)
    Set {
        product_id: String,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,

        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Empty the cart
    Clear,
}

fn parse_price(s: &str) -> Result<Price, String> {
    let amount: Decimal = s.trim().parse().map_err(|e| format!("{e}"))?;
    Price::new(amount).map_err(|e| e.to_string())
}

pub fn run(provider: &SessionProvider, action: CartAction) {
    let cart = provider.cart();

    match action {
        CartAction::Show => {}
        CartAction::Add {
            product_id,
            name,
            price,
            variant,
            image,
            quantity,
        } => {
            let mut item = CartItem::new(product_id, name, price).quantity(quantity);
            item.variant = variant;
            item.image_ref = image;
            cart.add(item);
        }
        CartAction::Remove {
            product_id,
            variant,
        } => cart.remove(&product_id, variant.as_deref()),
        CartAction::Set {
            product_id,
            quantity,
            variant,
        } => cart.set_quantity(&product_id, variant.as_deref(), quantity),
        CartAction::Clear => cart.clear(),
    }

    print_cart(&cart.state());
}

fn print_cart(state: &CartState) {
    if state.is_empty() {
        println!("Cart is empty");
        return;
    }

    for line in state.lines() {
        let variant = line
            .variant
            .as_deref()
            .map_or_else(String::new, |v| format!(" ({v})"));
        println!(
            "{:>4} x {}{}  [{}]  {} each  {}",
            line.quantity,
            line.name,
            variant,
            line.product_id,
            line.unit_price,
            line.line_total()
        );
    }
    println!("{} items, total {}", state.count(), state.total());
}
