use rand::{RngCore, SeedableRng, rngs::SmallRng};
use zoe_lang::{
    Block, Host, Literal, Machine, Memory, Operator, Point, Register, RegisterRef, Torus, Turn,
    parse_block, parse_rules,
};

struct Sandbox {
    rng: SmallRng,
    memory: Memory,
    location: Point,
    moves: usize,
    budget: usize,
}

impl Sandbox {
    fn new(budget: usize) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(0xABCD),
            memory: Memory::new(),
            location: Point::new(10.0, 20.0),
            moves: 0,
            budget,
        }
    }
}

impl Host for Sandbox {
    fn read_register(&mut self, register: RegisterRef) -> Literal {
        match register.register {
            Register::Location => Literal::from(self.location),
            Register::Age => Literal::Number(42.0),
            _ => Literal::ZERO,
        }
    }

    fn read_memory(&mut self, key: &Literal) -> Literal {
        self.memory.get(key)
    }

    fn write_memory(&mut self, key: Literal, value: Literal) {
        self.memory.put(key, value, 10);
    }

    fn perform_action(&mut self, operator: Operator, _operand: &Literal) -> Turn {
        if operator == Operator::Move {
            self.moves += 1;
            self.location.x += 1.0;
            return Turn::Finished;
        }
        Turn::Continues
    }

    fn max_operand_stack_depth(&self) -> usize {
        16
    }

    fn max_steps_per_resume(&self) -> usize {
        self.budget
    }

    fn random_source(&mut self) -> &mut dyn RngCore {
        &mut self.rng
    }

    fn torus(&self) -> Torus {
        Torus::new(100.0, 100.0)
    }
}

fn run_to_exit(program: &Block, host: &mut Sandbox) -> Machine {
    let mut machine = Machine::new(program);
    for _ in 0..10_000 {
        if machine.run(host) == Turn::Exited {
            return machine;
        }
    }
    panic!("program never exited");
}

#[test]
fn genome_text_parses_and_renders_back() {
    let source = r#"
        // flee when hurt
        When { Me.Pain, And It.IsFamily } Do { Turn Me.Away, Move }
        /* always graze */
        Do { Bite, Push "fed", Print }
    "#;
    let rules = parse_rules(source).expect("genome parses");
    assert_eq!(rules.len(), 2);
    assert!(rules[1].condition.is_none());

    let rendered: Vec<String> = rules.iter().map(|rule| rule.render("\n")).collect();
    let reparsed = parse_rules(&rendered.join("\n")).expect("rendered genome parses");
    assert_eq!(reparsed, rules);
}

#[test]
fn syntax_errors_report_position() {
    let err = parse_rules("Do { Move,\n  Fly }").expect_err("unknown operator");
    assert_eq!(err.line, 2);
    assert_eq!(err.found, "'Fly'");

    let err = parse_rules("When { Me.Pain }").expect_err("missing Do");
    assert_eq!(err.line, 1);
}

#[test]
fn memory_round_trip_through_programs() {
    let mut host = Sandbox::new(100);
    let unset = run_to_exit(&parse_block("{ Get \"home\" }").expect("parse"), &mut host);
    assert_eq!(unset.top(), Literal::ZERO);

    let program = parse_block("{ Me.Location, Set \"home\", Pop, Get \"home\" }").expect("parse");
    let machine = run_to_exit(&program, &mut host);
    assert_eq!(machine.top(), Literal::from(Point::new(10.0, 20.0)));
}

#[test]
fn division_by_literal_zero_is_numeric_zero() {
    let mut host = Sandbox::new(100);
    let machine = run_to_exit(&parse_block("{ 9, DividedBy 0 }").expect("parse"), &mut host);
    assert_eq!(machine.top(), Literal::Number(0.0));
    assert!(machine.top().to_number().is_finite());
}

#[test]
fn distance_between_remembered_locations() {
    let mut host = Sandbox::new(100);
    let program = parse_block(
        "{ Me.Location, Set \"start\", Move, Me.Location, Minus { Get \"start\" } }",
    )
    .expect("parse");
    let machine = run_to_exit(&program, &mut host);
    assert_eq!(host.moves, 1);
    assert_eq!(machine.top(), Literal::Number(1.0));
}

#[test]
fn bounded_runs_match_an_unbounded_run() {
    let program = parse_block(
        "{ 0, Set \"n\", Me.Age, Set \"a\", 1,
           While { Get \"n\", Plus 1, Set \"n\", LessThan 5 },
           Pop, Get \"n\", Times { Get \"a\" }, Move, AbsoluteVal }",
    )
    .expect("parse");

    let mut reference = Sandbox::new(usize::MAX);
    let expected = run_to_exit(&program, &mut reference);
    assert_eq!(expected.top(), Literal::Number(210.0));

    for budget in [1, 2, 3, 7, 13] {
        let mut host = Sandbox::new(budget);
        let machine = run_to_exit(&program, &mut host);
        assert_eq!(machine.stack(), expected.stack(), "budget {budget}");
        assert_eq!(host.moves, reference.moves);
        assert_eq!(host.memory, reference.memory);
    }
}
