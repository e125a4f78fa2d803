use shadow_rs::ShadowBuilder;

fn main() {
    // Build metadata for `pushgate --version`
    ShadowBuilder::builder()
        .build()
        .expect("Failed to generate build metadata");
}
