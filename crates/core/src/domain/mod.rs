pub mod cart;
pub mod customer;
pub mod item;
pub mod order;
