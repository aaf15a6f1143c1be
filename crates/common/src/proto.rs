//! Generated bindings for the `threecities.v1` transfer verification contract.

#![allow(clippy::all)]

tonic::include_proto!("threecities.v1");

pub use transfer_verification_service_client::TransferVerificationServiceClient;
