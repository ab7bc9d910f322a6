pub mod contract;
pub mod lead;
