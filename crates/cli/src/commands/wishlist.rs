//! Wishlist commands.
//!
//! In server mode (`SWAN_WISHLIST_SYNC=server`) these need a logged-in
//! session; see `swan-cli auth login`.

use clap::Subcommand;
use swan_botanical_core::{ProductId, WishlistEntry};
use swan_botanical_session::{SessionProvider, ToggleOutcome, WishlistError, WishlistState};

#[derive(Subcommand)]
pub enum WishlistAction {
    /// List liked products
    Show,
    /// Like a product, or unlike it if already liked
    Toggle {
        /// Product id
        product_id: String,

        /// Display name
        #[arg(short, long, default_value = "")]
        name: String,

        /// Image reference
        #[arg(short, long)]
        image: Option<String>,
    },
    /// Unlike a product
    Remove { product_id: String },
    /// Pull the server-held wishlist
    Refresh,
}

pub async fn run(provider: &SessionProvider, action: WishlistAction) -> Result<(), WishlistError> {
    let wishlist = provider.wishlist();

    match action {
        WishlistAction::Show => {}
        WishlistAction::Toggle {
            product_id,
            name,
            image,
        } => {
            let mut entry = WishlistEntry::new(product_id, name);
            entry.image_ref = image;
            let id = entry.product_id.clone();
            match wishlist.toggle(entry).await? {
                ToggleOutcome::Added => println!("Added {id}"),
                ToggleOutcome::Removed => println!("Removed {id}"),
            }
        }
        WishlistAction::Remove { product_id } => {
            wishlist.remove(&ProductId::new(product_id)).await?;
        }
        WishlistAction::Refresh => wishlist.refresh().await?,
    }

    print_wishlist(&wishlist.state());
    Ok(())
}

fn print_wishlist(state: &WishlistState) {
    if state.is_empty() {
        println!("Wishlist is empty");
        return;
    }

    for entry in state.entries() {
        let price = entry
            .unit_price
            .map_or_else(String::new, |p| format!("  {p}"));
        println!("{}  [{}]{}", entry.name, entry.product_id, price);
    }
    println!("{} liked", state.len());
}
