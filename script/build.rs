fn main() {
    // Guest ELF is only needed for real zkVM proofs
    #[cfg(feature = "sp1")]
    sp1_build::build_program_with_args("../program", Default::default());
}
