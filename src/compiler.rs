//! Lowering from symbolic statements to a resolved SUBLEQ cell image.
//!
//! Compilation runs in two passes. The first pass only accumulates expansion
//! sizes: every statement has a fixed footprint, so each label can be bound
//! to the address of the cell that follows it without back-patching. The
//! second pass emits the cells of every expansion and rewrites their symbolic
//! operands into final integers.
//!
//! Scratch cells (`$X`, `$Y` in the lowering tables) are allocated at the
//! tail of the image, one fresh zero-initialised slot per use, so no two
//! expansions ever share a temporary. Immediate `[...]` operands are interned
//! into a constant pool between the user cells and the temporaries.

use std::collections::HashMap;

use logos::Span;

use crate::bytecode;
use crate::error::{ErrorKind, SourceError};
use crate::symbol_table::SymbolTable;
use crate::symbolic::program::{
    Instruction,
    OpCode,
    Operand,
    Program,
    RawData,
    Statement,
    Value,
};

/// One memory location prior to resolution.
#[derive(Debug, Clone)]
enum Cell {
    /// A final value: a literal operand, an internal branch target or a trap
    /// sentinel.
    Int(i64),

    /// A label reference, resolved to `address_of(label) + offset`.
    Label {
        label: String,
        offset: i64,
        span: Span,
    },

    /// The address of a constant pool slot.
    Pool(usize),

    /// The address of a scratch cell.
    Temp(usize),
}

#[derive(Debug, Default)]
struct Lowerer {
    cells: Vec<Cell>,
    pool: Vec<(Value, Span)>,
    pool_index: HashMap<Value, usize>,
    temp_count: usize,
}

impl Lowerer {
    /// Allocates a fresh scratch cell.
    fn temp(&mut self) -> Cell {
        let id = self.temp_count;
        self.temp_count += 1;

        Cell::Temp(id)
    }

    /// Returns the pool slot holding `value`, interning it on first use.
    fn intern(&mut self, value: &Value, span: &Span) -> usize {
        if let Some(&id) = self.pool_index.get(value) {
            return id;
        }

        let id = self.pool.len();
        self.pool.push((value.clone(), span.clone()));
        self.pool_index.insert(value.clone(), id);

        id
    }

    fn operand(&mut self, operand: &Operand, span: &Span) -> Cell {
        match operand {
            Operand::Address(value) => Cell::Int(*value),
            Operand::Symbol { label, offset } => Cell::Label {
                label: label.clone(),
                offset: *offset,
                span: span.clone(),
            },
            Operand::Immediate(value) => Cell::Pool(self.intern(value, span)),
        }
    }

    fn triple(&mut self, a: Cell, b: Cell, c: Cell) {
        self.cells.push(a);
        self.cells.push(b);
        self.cells.push(c);
    }

    /// `mov s d` with a caller-provided scratch cell: zero the destination,
    /// then subtract the negated source into it.
    fn mov(&mut self, ip: i64, x: Cell, s: Cell, d: Cell) {
        self.triple(d.clone(), d.clone(), Cell::Int(ip + 3));
        self.triple(s, x.clone(), Cell::Int(ip + 6));
        self.triple(x.clone(), d, Cell::Int(ip + 9));
        self.triple(x.clone(), x, Cell::Int(ip + 12));
    }

    /// `beq o target` with a caller-provided scratch cell. The first row
    /// separates negative values (which fall through to the exit row at
    /// `ip+12`) from non-negative ones; the final row then branches iff the
    /// observed value is also non-positive, i.e. exactly zero.
    fn beq(&mut self, ip: i64, x: Cell, o: Cell, target: Cell) {
        self.triple(o.clone(), x.clone(), Cell::Int(ip + 6));
        self.triple(x.clone(), x.clone(), Cell::Int(ip + 12));
        self.triple(x.clone(), x.clone(), Cell::Int(ip + 9));
        self.triple(x, o, target);
    }

    /// Emits the expansion of one instruction starting at address `ip`.
    fn instruction(&mut self, ip: i64, instruction: &Instruction, span: &Span) {
        let ops: Vec<Cell> = instruction.operands
            .iter()
            .map(|operand| self.operand(operand, span))
            .collect();

        match instruction.opcode {
            OpCode::NoOperation => (),

            OpCode::Subleq => {
                self.triple(ops[0].clone(), ops[1].clone(), ops[2].clone());
            },

            OpCode::Add => {
                let x = self.temp();
                self.triple(ops[0].clone(), x.clone(), Cell::Int(ip + 3));
                self.triple(x.clone(), ops[1].clone(), Cell::Int(ip + 6));
                self.triple(x.clone(), x, Cell::Int(ip + 9));
            },

            OpCode::Subtract => {
                self.triple(ops[0].clone(), ops[1].clone(), Cell::Int(ip + 3));
            },

            OpCode::Zero => {
                self.triple(ops[0].clone(), ops[0].clone(), Cell::Int(ip + 3));
            },

            OpCode::Move => {
                let x = self.temp();
                self.mov(ip, x, ops[0].clone(), ops[1].clone());
            },

            OpCode::Jump => {
                let x = self.temp();
                self.triple(x.clone(), x, ops[0].clone());
            },

            OpCode::BranchZero => {
                let x = self.temp();
                self.beq(ip, x, ops[0].clone(), ops[1].clone());
            },

            OpCode::Compare => {
                // mov o1 $Y; sub o2 $Y; beq $Y target
                let x = self.temp();
                let y = self.temp();

                self.mov(ip, x.clone(), ops[0].clone(), y.clone());
                self.triple(ops[1].clone(), y.clone(), Cell::Int(ip + 15));
                self.beq(ip + 15, x, y, ops[2].clone());
            },

            OpCode::In => {
                self.triple(Cell::Int(-1), ops[0].clone(), Cell::Int(ip + 3));
            },

            OpCode::Out => {
                self.triple(ops[0].clone(), Cell::Int(-1), Cell::Int(ip + 3));
            },

            OpCode::Halt => {
                self.triple(Cell::Int(-1), Cell::Int(-1), Cell::Int(0));
            },
        }
    }
}

/// Number of cells a statement occupies in the image.
fn statement_size(statement: &Statement) -> usize {
    match statement {
        Statement::Instr(instruction) => instruction.opcode.size(),
        Statement::Raw(RawData::Int(_)) => 1,
        Statement::Raw(RawData::Bytes(bytes)) => bytes.len(),
        Statement::Label(_) | Statement::Directive { .. } => 0,
    }
}

/// Compile a symbolic program into a resolved cell image.
///
/// You probably want to use this via
/// [Program::compile](crate::symbolic::Program::compile).
pub fn compile(program: Program) -> Result<bytecode::Program, SourceError> {
    // Pass 1: bind every label to its offset from the first user cell and
    // remember the last ENTRY directive.
    let mut symbol_table = SymbolTable::new();
    let mut entry = None;
    let mut offset = 0i64;

    for entry_statement in &program.statements {
        match &entry_statement.statement {
            Statement::Label(label) => {
                symbol_table.define_symbol(entry_statement.span.clone(), label, offset)
                    .map_err(|_previous| SourceError::new(
                        entry_statement.span.clone(),
                        ErrorKind::DuplicateLabel { label: label.clone() },
                    ))?;
            },

            Statement::Directive { key, value } if key == "ENTRY" => {
                entry = Some((value.clone(), entry_statement.span.clone()));
            },

            // Unrecognized directive keys are ignored.
            Statement::Directive { .. } => (),

            statement => offset += statement_size(statement) as i64,
        }
    }

    // An ENTRY naming anything but the first cell needs a `jmp` prologue at
    // address 0, which shifts every user cell by 3.
    let entry = match entry {
        None => None,
        Some((label, span)) => {
            let address = symbol_table.address_of(&label)
                .ok_or_else(|| SourceError::new(span.clone(), ErrorKind::UnknownLabel {
                    label: label.clone(),
                }))?;

            if address == 0 {
                None
            } else {
                Some((label, span))
            }
        },
    };

    let base = match entry {
        Some(_) => 3,
        None => 0,
    };

    symbol_table.relocate(base);

    // Pass 2: emit the cells of every expansion.
    let mut lowerer = Lowerer::default();

    if let Some((label, span)) = entry {
        let x = lowerer.temp();
        lowerer.triple(x.clone(), x, Cell::Label { label, offset: 0, span });
    }

    let mut ip = base;

    for entry_statement in &program.statements {
        match &entry_statement.statement {
            Statement::Instr(instruction) => {
                lowerer.instruction(ip, instruction, &entry_statement.span);
            },

            Statement::Raw(RawData::Int(operand)) => {
                let cell = lowerer.operand(operand, &entry_statement.span);
                lowerer.cells.push(cell);
            },

            Statement::Raw(RawData::Bytes(bytes)) => {
                for byte in bytes {
                    lowerer.cells.push(Cell::Int(*byte as i64));
                }
            },

            Statement::Label(_) | Statement::Directive { .. } => (),
        }

        ip += statement_size(&entry_statement.statement) as i64;
    }

    // The constant pool sits after the user cells, the temporaries after the
    // pool.
    let pool_base = ip;
    let temp_base = pool_base + lowerer.pool.len() as i64;

    let mut cells = Vec::with_capacity(lowerer.cells.len() + lowerer.pool.len() + lowerer.temp_count);

    for cell in &lowerer.cells {
        cells.push(resolve(cell, &symbol_table, pool_base, temp_base)?);
    }

    for (value, span) in &lowerer.pool {
        cells.push(match value {
            Value::Literal(value) => *value,
            Value::Symbol(label) => symbol_table.address_of(label)
                .ok_or_else(|| SourceError::new(span.clone(), ErrorKind::UnknownLabel {
                    label: label.clone(),
                }))?,
        });
    }

    cells.extend(std::iter::repeat(0).take(lowerer.temp_count));

    Ok(bytecode::Program {
        cells,
        symbol_table,
    })
}

fn resolve(cell: &Cell, symbol_table: &SymbolTable, pool_base: i64, temp_base: i64)
    -> Result<i64, SourceError>
{
    match cell {
        Cell::Int(value) => Ok(*value),
        Cell::Label { label, offset, span } => {
            let address = symbol_table.address_of(label)
                .ok_or_else(|| SourceError::new(span.clone(), ErrorKind::UnknownLabel {
                    label: label.clone(),
                }))?;

            Ok(address + offset)
        },
        Cell::Pool(id) => Ok(pool_base + *id as i64),
        Cell::Temp(id) => Ok(temp_base + *id as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic;

    fn compile_source(source: &str) -> Result<bytecode::Program, SourceError> {
        symbolic::Program::parse(source).expect("parse failed").compile()
    }

    #[test]
    fn test_compile_add() {
        let program = compile_source("x: int 5\ny: int 7\nadd x y\nhalt\n").unwrap();

        // x y | add: o1 $X ip+3, $X o2 ip+6, $X $X ip+9 | halt | $X
        assert_eq!(
            program.cells,
            vec![5, 7, 0, 14, 5, 14, 1, 8, 14, 14, 11, -1, -1, 0, 0],
        );
        assert_eq!(program.symbol_table.address_of("x"), Some(0));
        assert_eq!(program.symbol_table.address_of("y"), Some(1));
    }

    #[test]
    fn test_compile_entry_prologue() {
        let program = compile_source("#set ENTRY=main\nv: int 9\nmain: out v\nhalt\n").unwrap();

        // jmp main | v | out: v -1 ip+3 | halt | $X
        assert_eq!(
            program.cells,
            vec![10, 10, 4, 9, 3, -1, 7, -1, -1, 0, 0],
        );
        assert_eq!(program.symbol_table.address_of("v"), Some(3));
        assert_eq!(program.symbol_table.address_of("main"), Some(4));
    }

    #[test]
    fn test_compile_entry_at_address_zero() {
        // The first cell is already the entry point; no prologue is emitted.
        let program = compile_source("#set ENTRY=main\nmain: halt\n").unwrap();

        assert_eq!(program.cells, vec![-1, -1, 0]);
        assert_eq!(program.symbol_table.address_of("main"), Some(0));
    }

    #[test]
    fn test_compile_beq_rows() {
        let program = compile_source("o: int 4\nend: beq o end\n").unwrap();

        // Row two exits the macro, row three falls into row four.
        assert_eq!(
            program.cells[1..13],
            [0, 13, 7, 13, 13, 13, 13, 13, 10, 13, 0, 1],
        );
    }

    #[test]
    fn test_compile_cmp_is_mov_sub_beq() {
        let program = compile_source("a: int 1\nb: int 2\ncmp a b 0\n").unwrap();

        let ip: i64 = 2;
        let x: i64 = 29;
        let y: i64 = 30;

        assert_eq!(
            program.cells[2..29],
            [
                // mov a $Y
                y, y, ip + 3,
                0, x, ip + 6,
                x, y, ip + 9,
                x, x, ip + 12,
                // sub b $Y
                1, y, ip + 15,
                // beq $Y 0
                y, x, ip + 21,
                x, x, ip + 27,
                x, x, ip + 24,
                x, y, 0,
            ],
        );
    }

    #[test]
    fn test_macro_locality() {
        // Every internal branch target of an expansion of length n starting
        // at ip stays within [ip, ip + n]. The last row of beq and cmp (and
        // the only row of jmp) carries the user's branch target and is not
        // internal.
        let source = "p: int 1\nq: int 2\nadd p q\nmov p q\nbeq p p\ncmp p q p\nnoop\nzer p\n";
        let program = compile_source(source).unwrap();

        let expansions: [(usize, usize, &[usize]); 5] = [
            (2, 9, &[0, 1, 2]),               // add
            (11, 12, &[0, 1, 2, 3]),          // mov
            (23, 12, &[0, 1, 2]),             // beq
            (35, 27, &[0, 1, 2, 3, 4, 5, 6, 7]), // cmp
            (62, 3, &[0]),                    // zer
        ];

        for &(ip, size, rows) in &expansions {
            for &row in rows {
                let target = program.cells[ip + row * 3 + 2];
                assert!(
                    target >= ip as i64 && target <= (ip + size) as i64,
                    "branch target {} escapes expansion at {}..{}",
                    target, ip, ip + size,
                );
            }
        }
    }

    #[test]
    fn test_temporary_freshness() {
        // No scratch address is shared between expansions.
        let program = compile_source("a: int 1\nb: int 2\nadd a b\nadd a b\nmov a b\njmp a\n").unwrap();

        let temps: Vec<i64> = vec![
            program.cells[3],  // first add
            program.cells[12], // second add
            program.cells[24], // mov
            program.cells[32], // jmp
        ];

        let mut deduped = temps.clone();
        deduped.sort();
        deduped.dedup();

        assert_eq!(deduped.len(), temps.len());

        // All scratch cells are zero-initialised at the image tail.
        for &temp in &temps {
            assert_eq!(program.cells[temp as usize], 0);
        }
    }

    #[test]
    fn test_constant_pool_interning() {
        let program = compile_source("m: int 3\nout [m]\nout [m]\nout [0x22]\n").unwrap();

        // Both [m] operands address the same pool slot.
        assert_eq!(program.cells[1], program.cells[4]);

        let m_slot = program.cells[1] as usize;
        let literal_slot = program.cells[7] as usize;

        assert_ne!(m_slot, literal_slot);
        assert_eq!(program.cells[m_slot], 0);
        assert_eq!(program.cells[literal_slot], 0x22);
    }

    #[test]
    fn test_label_offset_resolution() {
        let program = compile_source("m: int 1\nint 2\nint 3\nout m+2\n").unwrap();

        assert_eq!(program.cells[3], 2);
    }

    #[test]
    fn test_bytes_have_no_terminator() {
        let program = compile_source("bytes \"Hi\"\n").unwrap();

        assert_eq!(program.cells, vec![72, 105]);
    }

    #[test]
    fn test_duplicate_label() {
        let err = compile_source("a: int 1\na: int 2\n").unwrap_err();

        assert_eq!(err.kind, ErrorKind::DuplicateLabel { label: "a".to_string() });
    }

    #[test]
    fn test_unknown_label() {
        let err = compile_source("out missing\n").unwrap_err();

        assert_eq!(err.kind, ErrorKind::UnknownLabel { label: "missing".to_string() });
    }

    #[test]
    fn test_unknown_entry_label() {
        let err = compile_source("#set ENTRY=nowhere\nhalt\n").unwrap_err();

        assert_eq!(err.kind, ErrorKind::UnknownLabel { label: "nowhere".to_string() });
    }
}
