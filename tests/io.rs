use subleq::{
    bytecode::Width,
    emulator::{Emulator, TestIo},
    symbolic,
};

#[test]
fn test_io_echoes_the_input_byte() {
    let source = include_str!("io.sq");

    let program = symbolic::Program::parse(source)
        .expect("could not parse io.sq")
        .compile()
        .expect("could not compile io.sq");

    let mut io = TestIo::with_input(vec![0x41]);
    let mut emulator = Emulator::new(program.cells, Width::Four, &mut io);

    emulator.run().expect("execution faulted");

    assert_eq!(io.into_output(), [0x20, 0x41]);
}

#[test]
fn test_io_faults_without_input() {
    let source = include_str!("io.sq");

    let program = symbolic::Program::parse(source)
        .expect("could not parse io.sq")
        .compile()
        .expect("could not compile io.sq");

    let mut emulator = Emulator::new(program.cells, Width::Four, TestIo::new());

    assert!(emulator.run().is_err());
}
