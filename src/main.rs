fn main() {
    neurosense_lib::run()
}
