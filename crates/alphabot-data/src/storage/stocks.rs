//! 종목 스냅샷/재무제표 저장소.
//!
//! 종목 하나를 하나의 트랜잭션으로 저장합니다. 실패하면 그 종목만 롤백됩니다.

use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::provider::yahoo::{CompanySnapshot, FinancialStatementRow};

/// `stocks` / `financial_statements` 저장소.
#[derive(Clone)]
pub struct StockStore {
    pool: PgPool,
}

impl StockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 스냅샷과 재무제표를 한 트랜잭션으로 저장.
    ///
    /// 반환값은 저장된 재무제표 행 수.
    #[instrument(skip(self, snapshot, statements), fields(code = %snapshot.code, statements = statements.len()))]
    pub async fn save_ticker(
        &self,
        snapshot: &CompanySnapshot,
        statements: &[FinancialStatementRow],
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        upsert_snapshot(&mut *tx, snapshot).await?;
        let saved = upsert_statements(&mut *tx, &snapshot.code, statements).await?;

        tx.commit().await?;
        debug!(saved, "종목 저장 완료");
        Ok(saved)
    }
}

/// `stocks` 행 upsert (code 기준, `updated_at` 갱신).
pub async fn upsert_snapshot(conn: &mut PgConnection, snapshot: &CompanySnapshot) -> Result<()> {
    sqlx::query(
        r#"
            INSERT INTO stocks (
                code, company_name, sector, industry, country,
                website, full_time_employees, business_summary, current_price, previous_close,
                open_price, day_high, day_low, market_cap, volume,
                average_volume_10d, pe_ratio, forward_pe, pbr, psr,
                eps, forward_eps, enterprise_value, ev_to_revenue, ev_to_ebitda,
                profit_margins, operating_margins, gross_margins, roa, roe,
                total_debt, total_cash, debt_to_equity, free_cashflow, revenue_growth,
                earnings_growth, week52_high, week52_low, fifty_day_average, two_hundred_day_average,
                beta, dividend_rate, dividend_yield, payout_ratio, ex_dividend_date,
                last_dividend_value, recommendation, target_mean_price, target_high_price, target_low_price,
                number_of_analyst_opinions,
                updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                $21, $22, $23, $24, $25, $26, $27, $28, $29, $30,
                $31, $32, $33, $34, $35, $36, $37, $38, $39, $40,
                $41, $42, $43, $44, $45, $46, $47, $48, $49, $50,
                $51,
                NOW()
            )
            ON CONFLICT (code) DO UPDATE SET
                company_name = EXCLUDED.company_name,
                sector = EXCLUDED.sector,
                industry = EXCLUDED.industry,
                country = EXCLUDED.country,
                website = EXCLUDED.website,
                full_time_employees = EXCLUDED.full_time_employees,
                business_summary = EXCLUDED.business_summary,
                current_price = EXCLUDED.current_price,
                previous_close = EXCLUDED.previous_close,
                open_price = EXCLUDED.open_price,
                day_high = EXCLUDED.day_high,
                day_low = EXCLUDED.day_low,
                market_cap = EXCLUDED.market_cap,
                volume = EXCLUDED.volume,
                average_volume_10d = EXCLUDED.average_volume_10d,
                pe_ratio = EXCLUDED.pe_ratio,
                forward_pe = EXCLUDED.forward_pe,
                pbr = EXCLUDED.pbr,
                psr = EXCLUDED.psr,
                eps = EXCLUDED.eps,
                forward_eps = EXCLUDED.forward_eps,
                enterprise_value = EXCLUDED.enterprise_value,
                ev_to_revenue = EXCLUDED.ev_to_revenue,
                ev_to_ebitda = EXCLUDED.ev_to_ebitda,
                profit_margins = EXCLUDED.profit_margins,
                operating_margins = EXCLUDED.operating_margins,
                gross_margins = EXCLUDED.gross_margins,
                roa = EXCLUDED.roa,
                roe = EXCLUDED.roe,
                total_debt = EXCLUDED.total_debt,
                total_cash = EXCLUDED.total_cash,
                debt_to_equity = EXCLUDED.debt_to_equity,
                free_cashflow = EXCLUDED.free_cashflow,
                revenue_growth = EXCLUDED.revenue_growth,
                earnings_growth = EXCLUDED.earnings_growth,
                week52_high = EXCLUDED.week52_high,
                week52_low = EXCLUDED.week52_low,
                fifty_day_average = EXCLUDED.fifty_day_average,
                two_hundred_day_average = EXCLUDED.two_hundred_day_average,
                beta = EXCLUDED.beta,
                dividend_rate = EXCLUDED.dividend_rate,
                dividend_yield = EXCLUDED.dividend_yield,
                payout_ratio = EXCLUDED.payout_ratio,
                ex_dividend_date = EXCLUDED.ex_dividend_date,
                last_dividend_value = EXCLUDED.last_dividend_value,
                recommendation = EXCLUDED.recommendation,
                target_mean_price = EXCLUDED.target_mean_price,
                target_high_price = EXCLUDED.target_high_price,
                target_low_price = EXCLUDED.target_low_price,
                number_of_analyst_opinions = EXCLUDED.number_of_analyst_opinions,
                updated_at = NOW()
            "#,
    )
        .bind(&snapshot.code)
        .bind(&snapshot.company_name)
        .bind(&snapshot.sector)
        .bind(&snapshot.industry)
        .bind(&snapshot.country)
        .bind(&snapshot.website)
        .bind(&snapshot.full_time_employees)
        .bind(&snapshot.business_summary)
        .bind(&snapshot.current_price)
        .bind(&snapshot.previous_close)
        .bind(&snapshot.open_price)
        .bind(&snapshot.day_high)
        .bind(&snapshot.day_low)
        .bind(&snapshot.market_cap)
        .bind(&snapshot.volume)
        .bind(&snapshot.average_volume_10d)
        .bind(&snapshot.pe_ratio)
        .bind(&snapshot.forward_pe)
        .bind(&snapshot.pbr)
        .bind(&snapshot.psr)
        .bind(&snapshot.eps)
        .bind(&snapshot.forward_eps)
        .bind(&snapshot.enterprise_value)
        .bind(&snapshot.ev_to_revenue)
        .bind(&snapshot.ev_to_ebitda)
        .bind(&snapshot.profit_margins)
        .bind(&snapshot.operating_margins)
        .bind(&snapshot.gross_margins)
        .bind(&snapshot.roa)
        .bind(&snapshot.roe)
        .bind(&snapshot.total_debt)
        .bind(&snapshot.total_cash)
        .bind(&snapshot.debt_to_equity)
        .bind(&snapshot.free_cashflow)
        .bind(&snapshot.revenue_growth)
        .bind(&snapshot.earnings_growth)
        .bind(&snapshot.week52_high)
        .bind(&snapshot.week52_low)
        .bind(&snapshot.fifty_day_average)
        .bind(&snapshot.two_hundred_day_average)
        .bind(&snapshot.beta)
        .bind(&snapshot.dividend_rate)
        .bind(&snapshot.dividend_yield)
        .bind(&snapshot.payout_ratio)
        .bind(&snapshot.ex_dividend_date)
        .bind(&snapshot.last_dividend_value)
        .bind(&snapshot.recommendation)
        .bind(&snapshot.target_mean_price)
        .bind(&snapshot.target_high_price)
        .bind(&snapshot.target_low_price)
        .bind(&snapshot.number_of_analyst_opinions)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// `financial_statements` 행 upsert ((stock_code, report_period, report_type) 기준).
pub async fn upsert_statements(
    conn: &mut PgConnection,
    stock_code: &str,
    rows: &[FinancialStatementRow],
) -> Result<usize> {
    let mut saved = 0;

    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO financial_statements (
                stock_code, report_period, report_type, revenue, gross_profit,
                operating_income, ebitda, net_income, total_assets, total_liabilities,
                total_equity, operating_cash_flow, investing_cash_flow, financing_cash_flow, free_cash_flow,
                updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8,
                $9, $10, $11, $12, $13, $14, $15,
                NOW()
            )
            ON CONFLICT (stock_code, report_period, report_type) DO UPDATE SET
                revenue = EXCLUDED.revenue,
                gross_profit = EXCLUDED.gross_profit,
                operating_income = EXCLUDED.operating_income,
                ebitda = EXCLUDED.ebitda,
                net_income = EXCLUDED.net_income,
                total_assets = EXCLUDED.total_assets,
                total_liabilities = EXCLUDED.total_liabilities,
                total_equity = EXCLUDED.total_equity,
                operating_cash_flow = EXCLUDED.operating_cash_flow,
                investing_cash_flow = EXCLUDED.investing_cash_flow,
                financing_cash_flow = EXCLUDED.financing_cash_flow,
                free_cash_flow = EXCLUDED.free_cash_flow,
                updated_at = NOW()
            "#,
        )
        .bind(stock_code)
        .bind(row.report_period)
        .bind(row.report_type.as_str())
        .bind(row.revenue)
        .bind(row.gross_profit)
        .bind(row.operating_income)
        .bind(row.ebitda)
        .bind(row.net_income)
        .bind(row.total_assets)
        .bind(row.total_liabilities)
        .bind(row.total_equity)
        .bind(row.operating_cash_flow)
        .bind(row.investing_cash_flow)
        .bind(row.financing_cash_flow)
        .bind(row.free_cash_flow)
        .execute(&mut *conn)
        .await?;

        saved += 1;
    }

    Ok(saved)
}
