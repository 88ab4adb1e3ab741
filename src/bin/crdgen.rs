// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResourceExt;
use secret_share::types::{Consumer, Publisher};

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&Publisher::crd())?);
    println!("---");
    print!("{}", serde_yaml::to_string(&Consumer::crd())?);
    Ok(())
}
