pub mod archive;
pub mod cases;
pub mod files;
pub mod hasher;
pub mod intake;
pub mod inventory;
pub mod locks;
#[cfg(test)]
pub mod memory_store;
pub mod naming;
pub mod object_store;
pub mod storage_service;
