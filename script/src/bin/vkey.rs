use product_passport_script::backend::sp1::program_vkey_hash;

fn main() {
    // Setup logging
    product_passport_script::utils::setup_logger();

    println!("Verification key hash: {}", program_vkey_hash());
}
