//! Storefront core: bilingual (English/Indonesian) UI translation and the
//! multi-step checkout flow, including draft persistence and payment handoff.

pub mod checkout;
pub mod config;
pub mod faq;
pub mod i18n;
pub mod retry;
pub mod security;
pub mod storage;
