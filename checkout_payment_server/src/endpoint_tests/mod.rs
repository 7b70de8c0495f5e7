mod helpers;

mod checkout;
mod orders;
mod webhook;
