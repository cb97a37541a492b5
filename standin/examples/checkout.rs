// vim: tw=80
//! Mock one collaborator of a real object without replacing the object itself
//!
//! `Checkout` charges a `Gateway`.  In production the gateway is built with a
//! detached seam and always talks to the real payment backend.  The tests below
//! attach it to a registry instead and script just the `charge` operation,
//! leaving everything else about the gateway intact.
#![deny(warnings)]

use standin::*;

pub struct Gateway {
    endpoint: String,
    seam: Seam,
}

#[mockable]
impl Gateway {
    pub fn new(endpoint: &str, seam: Seam) -> Self {
        Gateway { endpoint: endpoint.to_string(), seam }
    }

    pub fn charge(&self, account: String, cents: u64) -> Result<String, String> {
        if cents == 0 {
            return Err("nothing to charge".to_string());
        }
        Ok(format!("{}/receipts/{}-{}", self.endpoint, account, cents))
    }

    #[standin(skip)]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

pub struct Checkout<'a> {
    gateway: &'a Gateway,
    items: Vec<u64>,
}

impl<'a> Checkout<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Checkout { gateway, items: Vec::new() }
    }

    pub fn add(&mut self, cents: u64) {
        self.items.push(cents);
    }

    pub fn pay(&self, account: &str) -> Result<String, String> {
        let total = self.items.iter().sum();
        self.gateway.charge(account.to_string(), total)
    }
}

fn main() {
    let gateway = Gateway::new("https://pay.example.com", Seam::detached());
    let mut checkout = Checkout::new(&gateway);
    checkout.add(250);
    checkout.add(199);
    println!("{} says {:?}", gateway.endpoint(), checkout.pay("acct-1"));
}
