// Non-linear mixer approximations from the 2A03 reference formulas:
//   pulse_out = 95.52 / (8128 / (p1 + p2) + 100)
//   tnd_out   = 163.67 / (24329 / (3*t + 2*n + d) + 100)

lazy_static! {
    pub static ref PULSE_TABLE: [f32; 31] = {
        let mut table = [0.0; 31];
        for (i, entry) in table.iter_mut().enumerate().skip(1) {
            *entry = 95.52 / (8128.0 / i as f32 + 100.0);
        }
        table
    };

    pub static ref TND_TABLE: [f32; 203] = {
        let mut table = [0.0; 203];
        for (i, entry) in table.iter_mut().enumerate().skip(1) {
            *entry = 163.67 / (24329.0 / i as f32 + 100.0);
        }
        table
    };
}
