pub mod accounts;
pub mod assignments;
pub mod exports;
pub mod notices;
