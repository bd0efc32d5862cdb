use subleq::{
    bytecode::Width,
    emulator::{Emulator, TestIo},
    symbolic,
};

#[test]
fn test_printloop_emits_the_buffer() {
    let source = include_str!("printloop.sq");

    let program = symbolic::Program::parse(source)
        .expect("could not parse printloop.sq")
        .compile()
        .expect("could not compile printloop.sq");

    let mut io = TestIo::new();
    let mut emulator = Emulator::new(program.cells, Width::Four, &mut io);

    let status = emulator.run().expect("execution faulted");

    assert_eq!(status, 0);

    let bytes: Vec<u8> = io.into_output().iter().map(|&value| value as u8).collect();

    assert_eq!(bytes, b"Hi");
}
