fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let mailbox = tonic_build::manual::Service::builder()
        .name("Mailbox")
        .package("matmul")
        .method(
            tonic_build::manual::Method::builder()
                .name("deliver")
                .route_name("Deliver")
                .input_type("crate::Envelope")
                .output_type("crate::Ack")
                .codec_path("tonic_prost::ProstCodec")
                .client_streaming()
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[mailbox]);
}
