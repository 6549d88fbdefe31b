pub mod carts;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod users;

pub use carts::Entity as Carts;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use users::Entity as Users;
