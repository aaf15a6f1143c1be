fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure()
        .build_server(false) // Verification runs remotely, we only call it
        .build_client(true)
        .compile_protos(
            &["proto/threecities/v1/transfer_verification.proto"],
            &["proto/"],
        )?;
    println!("cargo:rerun-if-changed=proto/threecities/v1/transfer_verification.proto");
    Ok(())
}
