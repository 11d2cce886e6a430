use crate::domain::user::User;
use crate::error::Result;
use std::io::Write;

/// Writes the final wallet table as CSV.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_users(&mut self, users: Vec<User>) -> Result<()> {
        self.writer.write_record(["user", "role", "balance"])?;
        for user in users {
            self.writer.write_record([
                user.id.to_string(),
                user.role.to_string(),
                user.wallet_balance.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Balance;
    use crate::domain::user::Role;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_writes_header_and_rows() {
        let mut buf = Vec::new();
        {
            let mut writer = BalanceWriter::new(&mut buf);
            let mut user = User::new(1, "ada", Role::Both, Utc::now());
            user.wallet_balance = Balance::new(dec!(12.50));
            writer.write_users(vec![user]).unwrap();
        }
        let output = String::from_utf8(buf).unwrap();
        assert_eq!(output, "user,role,balance\n1,both,12.50\n");
    }

    #[test]
    fn test_zero_balance_rendering() {
        let mut buf = Vec::new();
        {
            let mut writer = BalanceWriter::new(&mut buf);
            writer
                .write_users(vec![User::new(2, "bob", Role::Seller, Utc::now())])
                .unwrap();
        }
        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("2,seller,0"));
    }
}
